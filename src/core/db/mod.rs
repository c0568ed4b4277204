/// Database Module
///
/// The data access layer of the gradebook, split into three concerns:
/// - **Connection Management** (`connection.rs`): opens and closes the single live connection
/// - **Schema Bootstrap** (`schema.rs`): creates the gradebook tables when absent
/// - **Queries** (`query.rs`): typed course, student and grade operations
///
/// All operations return the crate-wide `GradebookError`.
pub mod connection;
pub mod query;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use schema::*;
