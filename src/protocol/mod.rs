// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Line-oriented text protocol used to tune and command the servo loop.

pub mod console;
pub mod messages;
pub mod parser;

pub use console::Console;
pub use messages::{Command, Reply};
pub use parser::Parser;
