pub mod ansible_processes;
pub mod logged_in_users;
pub mod no_operation;
pub mod passmark;
pub mod performance;
pub mod ssh_sessions;
