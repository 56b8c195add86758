use crate::net::{Connection, DeliverPacket, Endpoint, NetWorld, NodeId, SimSocket};
use crate::sim::{SimTime, Simulator};
use crate::topo::chain::{ChainOpts, build_chain};
use crate::topo::dumbbell::{DumbbellOpts, build_dumbbell};

const PORT: u16 = 8081;

fn connected_socket(world: &mut NetWorld, src: NodeId, dst: NodeId) -> SimSocket {
    world.net.listen(Endpoint::new(dst, PORT));
    let mut sock = SimSocket::new(src);
    sock.bind(&mut world.net).expect("bind");
    sock.connect(Endpoint::new(dst, PORT), &mut world.net).expect("connect");
    sock
}

#[test]
fn chain_route_and_single_packet_latency() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_chain(&mut world, &ChainOpts::default());
    let (n0, n3) = (topo.nodes[0], topo.nodes[3]);

    assert_eq!(world.net.route(n0, n3), Some(topo.nodes.clone()));
    assert_eq!(topo.bottleneck, (topo.nodes[1], topo.nodes[2]));

    let mut sock = connected_socket(&mut world, n0, n3);
    let flow_id = sock.flow_id().expect("flow id after connect");
    assert_eq!(sock.send(1040, &mut sim, &mut world.net), Ok(1040));
    sim.run(&mut world);

    // 2 * (832us + 1ms) 接入链路 + (8.32ms + 3ms) 瓶颈链路
    let expected = SimTime::from_micros(2 * (832 + 1_000) + 8_320 + 3_000);
    let flow = world.net.stats.flow(flow_id).expect("flow stats");
    assert_eq!(flow.tx_pkts, 1);
    assert_eq!(flow.rx_pkts, 1);
    assert_eq!(flow.rx_bytes, 1040);
    assert_eq!(flow.first_tx, Some(SimTime::ZERO));
    assert_eq!(flow.last_rx, Some(expected));
    assert_eq!(world.net.stats.dropped_pkts, 0);
}

#[test]
fn busy_links_queue_packets_in_fifo_order() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_chain(&mut world, &ChainOpts::default());
    let mut sock = connected_socket(&mut world, topo.nodes[0], topo.nodes[3]);
    let flow_id = sock.flow_id().expect("flow id");

    sock.send(1040, &mut sim, &mut world.net).expect("send 1");
    sock.send(1040, &mut sim, &mut world.net).expect("send 2");
    assert_eq!(world.net.link_backlog_bytes(topo.nodes[0], topo.nodes[1]), 1040);
    sim.run(&mut world);

    // 第二个包在瓶颈处排在第一个之后：再多一个瓶颈序列化时间
    let first = SimTime::from_micros(2 * (832 + 1_000) + 8_320 + 3_000);
    let second = first.saturating_add(SimTime::from_micros(8_320));
    let flow = world.net.stats.flow(flow_id).expect("flow stats");
    assert_eq!(flow.rx_pkts, 2);
    assert_eq!(flow.first_rx, Some(first));
    assert_eq!(flow.last_rx, Some(second));

    let tput = flow.throughput_bps().expect("throughput");
    let want = 2080.0 * 8.0 / second.as_secs_f64();
    assert!((tput - want).abs() < 1e-6, "tput={tput} want={want}");
}

#[test]
fn full_queue_tail_drops_and_counts_per_flow() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_chain(&mut world, &ChainOpts::default());
    let (n0, n1) = (topo.nodes[0], topo.nodes[1]);
    assert!(world.net.set_link_queue_capacity_bytes(n0, n1, 1040));
    let mut sock = connected_socket(&mut world, n0, topo.nodes[3]);
    let flow_id = sock.flow_id().expect("flow id");

    for _ in 0..3 {
        sock.send(1040, &mut sim, &mut world.net).expect("send accepted by socket");
    }
    sim.run(&mut world);

    let flow = world.net.stats.flow(flow_id).expect("flow stats");
    assert_eq!(flow.tx_pkts, 3);
    assert_eq!(flow.rx_pkts, 2);
    assert_eq!(flow.dropped_pkts, 1);
    assert_eq!(flow.dropped_bytes, 1040);
    assert_eq!(world.net.stats.dropped_pkts, 1);
}

#[test]
fn packet_to_a_port_without_listener_is_dropped() {
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_chain(&mut world, &ChainOpts::default());
    let route = vec![topo.nodes[0], topo.nodes[1]];
    let pkt = world.net.make_packet(7, 100, route, 4242);
    sim.schedule(SimTime::ZERO, DeliverPacket { to: topo.nodes[0], pkt });
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 0);
    assert_eq!(world.net.stats.dropped_pkts, 1);
    assert_eq!(world.net.stats.flow(7).map(|f| f.dropped_pkts), Some(1));
}

#[test]
fn dumbbell_routes_through_both_routers() {
    let mut world = NetWorld::default();
    let topo = build_dumbbell(&mut world, &DumbbellOpts::default());
    assert_eq!(topo.nodes.len(), 6);
    assert_eq!(world.net.node_count(), 6);
    let n = &topo.nodes;

    assert_eq!(world.net.route(n[0], n[2]), Some(vec![n[0], n[4], n[5], n[2]]));
    assert_eq!(world.net.route(n[1], n[3]), Some(vec![n[1], n[4], n[5], n[3]]));
    assert_eq!(world.net.route(n[0], n[1]), Some(vec![n[0], n[4], n[1]]));
    assert_eq!(world.net.route(n[3], n[3]), Some(vec![n[3]]));
    assert_eq!(topo.bottleneck, (n[4], n[5]));
    assert_eq!(world.net.node_name(n[4]), Some("n4"));
}

#[test]
fn route_to_isolated_or_unknown_node_is_none() {
    let mut world = NetWorld::default();
    let topo = build_chain(&mut world, &ChainOpts::default());
    let island = world.net.add_host("island");

    assert_eq!(world.net.route(topo.nodes[0], island), None);
    assert_eq!(world.net.route(topo.nodes[0], NodeId(99)), None);
}
