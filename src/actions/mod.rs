pub mod catalog;
pub mod registry;
pub mod validate;

pub use catalog::{action_names, find_action_def, ActionDef, ParamDef, ParamKind, ACTIONS};
pub use registry::{Action, ActionRegistry};
pub use validate::{
    validate_enum, validate_length, validate_params, validate_required, InputError,
};
