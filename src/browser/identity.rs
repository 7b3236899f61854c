use rand::Rng;

/// Picks a user agent uniformly at random from the pool
///
/// Returns None for an empty pool; configuration validation rejects those.
pub fn pick_user_agent(pool: &[String]) -> Option<&str> {
    if pool.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..pool.len());
    Some(pool[index].as_str())
}
