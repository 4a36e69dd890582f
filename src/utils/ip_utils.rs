// It's much easier to work with strings in the end.
// We only keep the first bytes of client addresses so the
// page_views table never stores a full IP.
pub fn extract_first_bytes(ip: &str) -> String {
  // Check if we got dots or ":"
  let bytes: Vec<&str> = ip.split('.').collect();
  if bytes.len() == 4 {
    return bytes[0..3].join(".");
  } else if ip != "::1" {
    // Probably ipv6.
    let bytes: Vec<&str> = ip.split(":").collect();
    if bytes.len() > 2 {
      return bytes[0..(bytes.len() - 2)].join(":");
    }
  }
  return String::from(ip);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ipv4_extract_first_bytes() {
    let sut = "111.12.22.254";
    let expected = String::from("111.12.22");
    let sut2 = "127.0.0.1";
    let expected2 = String::from("127.0.0");
    assert_eq!(extract_first_bytes(sut), expected);
    assert_eq!(extract_first_bytes(sut2), expected2);
  }

  #[test]
  fn ipv6_extract_first_bytes() {
    let sut = "::1";
    let expected = String::from("::1");
    let sut2 = "2001:0db8:85a3:0000:0000:8a2e:0370:7334";
    let expected2 = String::from("2001:0db8:85a3:0000:0000:8a2e");
    assert_eq!(extract_first_bytes(sut), expected);
    assert_eq!(extract_first_bytes(sut2), expected2);
  }

  #[test]
  fn invalid_address_gives_same_value() {
    let sut = "not an address";
    let expected = String::from("not an address");
    assert_eq!(extract_first_bytes(sut), expected);
  }
}
