pub mod secret_store;
