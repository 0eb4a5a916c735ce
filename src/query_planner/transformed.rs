/// Outcome of a rewrite: `Yes` when the input changed.
#[derive(Debug, PartialEq, Clone)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn get_plan(self) -> T {
        match self {
            Transformed::Yes(plan) | Transformed::No(plan) => plan,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }
}

impl<T: PartialEq> Transformed<T> {
    /// `Yes(after)` if `after` differs from `before`, else `No(before)`.
    pub fn compare(before: T, after: T) -> Self {
        if before == after {
            Transformed::No(before)
        } else {
            Transformed::Yes(after)
        }
    }
}
