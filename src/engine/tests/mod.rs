//! Book-level test suites.

mod amend_cancel_tests;
mod persistence_tests;
mod stop_tests;
