pub mod access;
pub mod class_hierarchy;
pub mod config;
pub mod errors;
pub mod image;
pub mod ir;
pub mod optimizer;
pub mod type_interner;

pub use access::{AccessFlags, HasAccess};
pub use class_hierarchy::ClassHierarchy;
pub use config::{OptimizerConfig, PgoInput, SingleImplConfig};
pub use errors::{ImageError, OptimizerError};
pub use image::{load_image, read_image, write_image};
pub use ir::{DexClass, DexClassesVector, DexField, DexMethod, DexProgram, Scope};
pub use optimizer::{PassContext, PassManager, PassReport, ScopePass, SingleImplPass, SingleImplStats};
pub use type_interner::{TypeId, TypeInterner};
