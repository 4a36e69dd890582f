use crate::utils::time_utils::current_timestamp;

/**
 * Counts how often the sensitive endpoints (login and
 * register) get hit per unit of time and blocks them
 * entirely for a specific "block time" when the counter
 * goes over the limit. Single global window, not per-IP,
 * which is crude but matches what it replaces.
 */
pub struct BasicRateLimiter {
  counter: u32,
  last_update: i64,
  is_limited: bool,
  max_requests: u32,
  max_requests_time: u32,
  block_duration: u32
}

impl BasicRateLimiter {

  pub fn new(
    max_requests: u32,
    max_requests_time: u32,
    block_duration: u32
  ) -> Self {
    Self {
      counter: 0,
      last_update: current_timestamp(),
      is_limited: false,
      max_requests,
      max_requests_time,
      block_duration
    }
  }

  pub fn is_locked(&self) -> bool {
    self.is_limited
  }

  pub fn is_expired(&self) -> bool {
    self.is_expired_at(current_timestamp())
  }

  fn is_expired_at(&self, now: i64) -> bool {
    // When locked, check against block_duration. Check
    // against max_requests_time otherwise.
    if self.is_locked() {
      now - self.last_update >= self.block_duration.into()
    } else {
      now - self.last_update >= self.max_requests_time.into()
    }
  }

  // Registers one request and returns whether the caller
  // should be blocked.
  pub fn update(&mut self) -> bool {
    self.update_at(current_timestamp())
  }

  // Clock injection so the tests don't have to sleep.
  fn update_at(&mut self, now: i64) -> bool {
    if self.is_expired_at(now) {
      // Window (or block) is over, reset:
      self.counter = 1;
      self.last_update = now;
      self.is_limited = false;
    } else if !self.is_limited {
      self.counter += 1;
      if self.counter >= self.max_requests {
        self.is_limited = true;
        self.last_update = now;
      }
    }
    self.is_limited
  }

}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blocks_after_max_requests_in_window() {
    let mut rl = BasicRateLimiter::new(5, 900, 900);
    let now = current_timestamp();
    for _ in 0..4 {
      assert!(!rl.update_at(now));
    }
    // Fifth request in the window trips the limit:
    assert!(rl.update_at(now));
    assert!(rl.is_locked());
    // And it stays locked while the block lasts:
    assert!(rl.update_at(now + 899));
  }

  #[test]
  fn unblocks_once_block_duration_has_passed() {
    let mut rl = BasicRateLimiter::new(2, 900, 900);
    let now = current_timestamp();
    rl.update_at(now);
    assert!(rl.update_at(now));
    assert!(!rl.update_at(now + 900));
    assert!(!rl.is_locked());
  }

  #[test]
  fn window_expiry_resets_the_counter() {
    let mut rl = BasicRateLimiter::new(3, 900, 900);
    let now = current_timestamp();
    rl.update_at(now);
    rl.update_at(now);
    // Next request lands in a fresh window, so the two
    // earlier ones no longer count:
    assert!(!rl.update_at(now + 901));
    assert!(!rl.update_at(now + 902));
    assert!(rl.update_at(now + 903));
  }
}
