pub mod cloud;
pub mod completions;
pub mod create;
pub mod delete;
pub mod edit;
pub mod keyring;
pub mod list;
pub mod password;
pub mod paths;
pub mod verify;
pub mod view;
