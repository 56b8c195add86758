use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_from_secs_f64_rounds_and_clamps() {
    assert_eq!(SimTime::from_secs_f64(1.0), SimTime::from_secs(1));
    assert_eq!(SimTime::from_secs_f64(0.5), SimTime::from_millis(500));
    assert_eq!(SimTime::from_secs_f64(1e-9 * 0.4), SimTime::ZERO);
    assert_eq!(SimTime::from_secs_f64(-3.0), SimTime::ZERO);
    assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
    assert_eq!(SimTime::from_secs_f64(1e30), SimTime::MAX);
    assert_eq!(SimTime::from_millis(1_500).as_secs_f64(), 1.5);
}

#[test]
fn sim_time_saturating_arithmetic() {
    assert_eq!(SimTime(5).saturating_add(SimTime(7)), SimTime(12));
    assert_eq!(SimTime::MAX.saturating_add(SimTime(1)), SimTime::MAX);
    assert_eq!(SimTime(5).saturating_sub(SimTime(7)), SimTime::ZERO);
}
