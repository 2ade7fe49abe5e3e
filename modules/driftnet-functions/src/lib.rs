pub mod builtins;
pub mod error;
pub mod pages;
pub mod registry;
pub mod router;
pub mod template;

pub use builtins::register_builtins;
pub use error::{FunctionError, FunctionResult, RegistryError, TemplateError};
pub use pages::search_page;
pub use registry::{
    FunctionHandler, FunctionOutput, FunctionRegistry, FunctionRegistryBuilder, FunctionSpec,
    Method, RegisteredFunction, ResponseKind,
};
pub use router::function_router;
pub use template::{render, Vars};
