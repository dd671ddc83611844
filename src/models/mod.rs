// src/models/mod.rs

pub mod branch;
pub mod course;
pub mod enrollment;
pub mod exam;
pub mod practice;
pub mod semester;
pub mod user;
