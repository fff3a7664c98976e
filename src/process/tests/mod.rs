//! Process layer tests with a scripted process table.

pub mod mock_process;
