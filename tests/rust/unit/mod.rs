mod dialect_tests;
mod loading_tests;
