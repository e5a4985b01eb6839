mod execute_query;

pub use execute_query::ExecuteQueryUseCase;
