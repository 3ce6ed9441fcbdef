// Smartmarks state managers
// The bookmark store, the mutation gateway in front of it, and the reconciled client view.

pub mod bookmark_store;
pub mod mutation_gateway;
pub mod reconciled_view;
