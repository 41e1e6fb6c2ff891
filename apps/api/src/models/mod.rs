pub mod chat;
pub mod contact;
pub mod portfolio;
pub mod project;
pub mod quiz;
pub mod schedule;
pub mod service;
pub mod user;
