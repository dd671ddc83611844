// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod branch;
pub mod course;
pub mod enrollment;
pub mod exam;
pub mod practice;
pub mod semester;
