//! Spheremap - Library for mapping panorama frames onto spherical LED layouts
//!
//! This library provides functionality to:
//! - Load element layouts from CSV with name-resolved columns
//! - Project element positions to equirectangular texture coordinates
//! - Quantize coordinates to pixel addresses and sample frame colors
//! - Diagnose pixel collisions and feature band coverage

pub mod analyze;
pub mod cli;
pub mod config;
pub mod engine;
pub mod frame;
pub mod geometry;
pub mod layout;
pub mod models;
pub mod output;
pub mod projection;
pub mod quantize;
pub mod sampler;
