//! The hello application: a user service assembled from configuration
//! declarations, with persistence, advice and event collaborators.

pub mod aop;
pub mod config;
pub mod crypto;
pub mod db;
pub mod eventbus;
pub mod service;
pub mod user;
pub mod web;
