pub mod auth;
pub mod enums;
pub mod error;
pub mod query;
pub mod requests;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use auth::{AdminAccess, Caller};
pub use enums::{ApprovalState, FormType, Role, SortField, SortOrder};
pub use error::CoreError;
pub use query::ListQuery;
pub use requests::{
    CommonFieldsPatch, CreateFormRequest, DetailsPatch, FormUpdate, NewForm, NewFormDetails,
    PesticidePatch, ShrubPatch,
};
pub use structs::{
    CommonFields, Form, FormDetails, FormView, NewApplication, NewPesticideDetails,
    PesticideApplication, PesticideDetails, ShrubDetails,
};
