#![allow(dead_code)]

pub mod command;
pub mod file;

pub const AUTHOR_NAME: &str = "fake_user";
pub const AUTHOR_EMAIL: &str = "fake_email@email.com";
pub const AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000";
pub const COMMITTER_NAME: &str = "revise_bot";
pub const COMMITTER_EMAIL: &str = "bot@email.com";
pub const COMMITTER_DATE: &str = "2024-06-01 08:30:00 +0200";
