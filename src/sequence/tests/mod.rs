//! Executor tests against scripted process layers

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod exit_tests;
#[cfg(test)]
mod preflight_tests;
