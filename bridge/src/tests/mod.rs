//! Scenario tests driving whole script hosts through the public surface

mod support;

mod console_tests;
mod import_tests;
mod path_invoker_tests;
