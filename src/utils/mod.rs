pub mod login_cache;
