//! Engine data structures: meshes, models, textures and instances.
//!
//! This module contains the core data types for scene representation:
//!
//! - `mesh_data` holds CPU-side vertex arrays and procedural primitives
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper and creation utilities (2D, depth, cubemap)
//! - `instance` holds per-instance transformation data
//! - `object` bundles a model with its instances for drawing

pub mod instance;
pub mod mesh_data;
pub mod model;
pub mod object;
pub mod texture;
