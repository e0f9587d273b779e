mod arena;
mod bootstrap;
mod config;
mod loop_runner;
mod room;
mod scene;
mod sim_loop;

pub(crate) use bootstrap::{build_app, make_link};
pub(crate) use loop_runner::run;
