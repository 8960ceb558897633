use super::*;

fn default_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(2000), Duration::from_millis(15_000), 1.5)
}

#[test]
fn delays_grow_by_half_and_cap() {
    let mut backoff = default_backoff();
    let delays: Vec<u128> = (0..7).map(|_| backoff.next_delay().as_millis()).collect();
    assert_eq!(delays, vec![2000, 3000, 4500, 6750, 10_125, 15_000, 15_000]);
}

#[test]
fn reset_returns_to_base() {
    let mut backoff = default_backoff();
    backoff.next_delay();
    backoff.next_delay();
    assert_eq!(backoff.current(), Duration::from_millis(4500));

    backoff.reset();

    assert_eq!(backoff.next_delay(), Duration::from_millis(2000));
}

#[test]
fn degenerate_parameters_never_shrink() {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_millis(100), 0.1);
    assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    assert_eq!(backoff.next_delay(), Duration::from_millis(500));

    let mut nan = Backoff::new(Duration::from_millis(10), Duration::from_millis(100), f64::NAN);
    assert_eq!(nan.next_delay(), Duration::from_millis(10));
    assert_eq!(nan.current(), Duration::from_millis(10));
}
