mod network;
mod paced_source;
mod sim_time;
