//! CrudService: generic CRUD using the safe SQL builder, plus payload
//! validation against synthesized models.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::PayloadValidator;
