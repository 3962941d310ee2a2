pub mod manager;
pub mod models;
pub mod procedure;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager, SqlPoolSource};
pub use procedure::{
    PgProcedureExecutor, ProcedureExecutor, ProcedureKind, ProcedureResult, SqlValue, StoredProcedureCall,
};
pub use repository::{DefaultRepository, ProcedureNames};
