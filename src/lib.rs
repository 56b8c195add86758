pub mod app;
pub mod net;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
