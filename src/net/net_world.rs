//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑与其上的应用。

use super::network::Network;
use super::socket::SimSocket;
use crate::app::{AppHost, AppStack};
use crate::sim::World;
use std::any::Any;

/// 默认的网络世界：持有 Network 以及跑在 `SimSocket` 上的应用栈。
pub struct NetWorld {
    pub net: Network,
    pub apps: AppStack<SimSocket>,
}

impl Default for NetWorld {
    fn default() -> Self {
        Self {
            net: Network::default(),
            apps: AppStack::for_host::<NetWorld>(),
        }
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl AppHost for NetWorld {
    type Conn = SimSocket;

    fn app_parts(&mut self) -> (&mut AppStack<SimSocket>, &mut Network) {
        (&mut self.apps, &mut self.net)
    }
}
