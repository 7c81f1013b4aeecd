// SPDX-License-Identifier: MIT

pub mod agents;
pub mod catalog;
pub mod config;
pub mod server;
pub mod sources;
pub mod workflow;
