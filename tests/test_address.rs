use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use blocknet::net::{Address, AddressV4, AddressV6, Endpoint, Family};

#[test]
fn test_v4_round_trips_through_text() {
    for s in ["0.0.0.0", "127.0.0.1", "192.168.10.254", "255.255.255.255"] {
        let addr: AddressV4 = s.parse().unwrap();
        assert_eq!(addr.to_string(), s);
    }
}

#[test]
fn test_v4_rejects_bad_syntax() {
    for s in ["", "1.2.3", "1.2.3.4.5", "256.0.0.1", "a.b.c.d", "1.2.3.4 "] {
        assert!(s.parse::<AddressV4>().is_err(), "{s:?} should not parse");
    }
}

#[test]
fn test_v4_integer_form_is_network_order() {
    let addr = AddressV4::new(10, 0, 0, 1);
    assert_eq!(addr.to_u32(), 0x0a00_0001);
    assert_eq!(AddressV4::from_u32(0x0a00_0001), addr);
    assert_eq!(addr.octets(), [10, 0, 0, 1]);
}

#[test]
fn test_v4_classification() {
    assert!(AddressV4::LOOPBACK.is_loopback());
    assert!(AddressV4::ANY.is_unspecified());
    assert!(AddressV4::new(224, 0, 0, 251).is_multicast());
    assert!(AddressV4::new(192, 168, 1, 1).is_private());
    assert!(AddressV4::new(169, 254, 3, 4).is_link_local());
    assert!(!AddressV4::new(8, 8, 8, 8).is_private());
}

#[test]
fn test_v4_arithmetic_wraps() {
    assert_eq!(AddressV4::new(10, 0, 0, 255).next(), AddressV4::new(10, 0, 1, 0));
    assert_eq!(AddressV4::BROADCAST.next(), AddressV4::ANY);
    assert_eq!(AddressV4::ANY.prev(), AddressV4::BROADCAST);

    let mut addr = AddressV4::new(1, 1, 1, 1);
    addr.increment();
    addr.increment();
    addr.decrement();
    assert_eq!(addr, AddressV4::new(1, 1, 1, 2));
}

#[test]
fn test_v6_parse_and_display() {
    let addr: AddressV6 = "2001:db8::1".parse().unwrap();
    assert_eq!(addr.to_string(), "2001:db8::1");
    assert_eq!(addr.scope_id(), 0);

    let scoped: AddressV6 = "fe80::1%7".parse().unwrap();
    assert!(scoped.is_link_local());
    assert_eq!(scoped.scope_id(), 7);
    assert_eq!(scoped.to_string(), "fe80::1%7");

    assert!("fe80::1%no-such-interface-here".parse::<AddressV6>().is_err());
    assert!("2001:db8:::1".parse::<AddressV6>().is_err());
}

#[test]
fn test_v4_mapped_conversion() {
    let v4 = AddressV4::new(192, 0, 2, 33);
    let mapped = v4.to_v4_mapped();
    assert!(mapped.is_v4_mapped());
    assert_eq!(mapped.to_string(), "::ffff:192.0.2.33");
    assert_eq!(mapped.to_v4(), Some(v4));
    assert_eq!(AddressV6::LOOPBACK.to_v4(), None);
}

#[test]
fn test_address_union() {
    let v4: Address = "10.1.2.3".parse().unwrap();
    let v6: Address = "::1".parse().unwrap();

    assert!(v4.is_v4());
    assert_eq!(v4.family(), Family::V4);
    assert!(v6.is_v6());
    assert!(v6.is_loopback());
    assert_eq!(v4.as_v6(), None);
    assert!("not an address".parse::<Address>().is_err());
}

#[test]
fn test_every_v4_sorts_before_every_v6() {
    let high_v4 = Address::from(AddressV4::BROADCAST);
    let low_v6 = Address::from(AddressV6::ANY);
    assert!(high_v4 < low_v6);

    let mut addrs: Vec<Address> = ["::2", "10.0.0.2", "::1", "10.0.0.1"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    addrs.sort();
    let text: Vec<String> = addrs.iter().map(ToString::to_string).collect();
    assert_eq!(text, ["10.0.0.1", "10.0.0.2", "::1", "::2"]);
}

#[test]
fn test_std_conversions() {
    let ip = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 9));
    let addr = Address::from(ip);
    assert_eq!(IpAddr::from(addr), ip);
    assert_eq!(Address::any(Family::V6).to_string(), "::");
    assert_eq!(Address::loopback(Family::V4).to_string(), "127.0.0.1");
}

#[test]
fn test_endpoint_accessors_do_not_depend_on_family() {
    let v4 = Endpoint::new(AddressV4::new(10, 0, 0, 1), 8080);
    let v6 = Endpoint::new(AddressV6::LOOPBACK, 443);

    assert_eq!(v4.port(), 8080);
    assert_eq!(v4.family(), Family::V4);
    assert_eq!(v6.port(), 443);
    assert_eq!(v6.address(), Address::from(AddressV6::LOOPBACK));
}

#[test]
fn test_endpoint_text_form() {
    let v4: Endpoint = "192.168.1.2:80".parse().unwrap();
    assert_eq!(v4.to_string(), "192.168.1.2:80");

    let v6: Endpoint = "[2001:db8::5]:8443".parse().unwrap();
    assert_eq!(v6.port(), 8443);
    assert_eq!(v6.to_string(), "[2001:db8::5]:8443");

    assert!("192.168.1.2".parse::<Endpoint>().is_err());
    assert!("2001:db8::5:80".parse::<Endpoint>().is_err());
}

#[test]
fn test_endpoint_mutation() {
    let mut ep = Endpoint::loopback(Family::V4, 1);
    ep.set_port(9000);
    ep.set_address(AddressV6::LOOPBACK);
    assert_eq!(ep.family(), Family::V6);
    assert_eq!(ep.port(), 9000);
    assert_eq!(ep.to_socket_addr(), "[::1]:9000".parse::<SocketAddr>().unwrap());
}
