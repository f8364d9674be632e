//! Properties of the full declaration pass over arbitrary private networks.

use std::net::Ipv4Addr;

use metrostack::{Ipv4Cidr, StackProps, declare_stack};
use proptest::prelude::*;

/// Private ranges between /16 and /24, host bits cleared.
fn private_range() -> impl Strategy<Value = Ipv4Cidr> {
    let ten = (any::<u8>(), any::<u8>()).prop_map(|(b, c)| Ipv4Addr::new(10, b, c, 0));
    let one_seven_two = (16u8..=31, any::<u8>()).prop_map(|(b, c)| Ipv4Addr::new(172, b, c, 0));
    let one_nine_two = any::<u8>().prop_map(|c| Ipv4Addr::new(192, 168, c, 0));
    let address = prop_oneof![ten, one_seven_two, one_nine_two];
    (address, 16u8..=24).prop_filter_map("range should be private", |(address, prefix)| {
        Ipv4Cidr::new(address, prefix)
            .ok()
            .filter(Ipv4Cidr::is_private)
    })
}

fn props_for(cidr: Ipv4Cidr, zones: u8) -> StackProps {
    let mut props = StackProps::reference();
    props.network.cidr = cidr;
    props.network.max_azs = zones;
    props
}

proptest! {
    #[test]
    fn carved_subnets_stay_inside_and_apart(cidr in private_range(), zones in 1u8..=4) {
        let declared = declare_stack(&props_for(cidr, zones))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let subnets: Vec<Ipv4Cidr> = declared
            .network
            .subnets()
            .map(|subnet| subnet.cidr())
            .collect();

        prop_assert_eq!(subnets.len(), usize::from(zones) * 2);
        for (index, subnet) in subnets.iter().enumerate() {
            prop_assert!(cidr.contains(subnet), "{} escapes {}", subnet, cidr);
            for other in subnets.iter().skip(index + 1) {
                prop_assert!(!subnet.overlaps(other), "{} overlaps {}", subnet, other);
            }
        }
    }

    #[test]
    fn declaration_is_deterministic(cidr in private_range(), zones in 1u8..=4) {
        let props = props_for(cidr, zones);
        let render = || {
            declare_stack(&props)
                .map_err(|err| TestCaseError::fail(err.to_string()))
                .and_then(|declared| {
                    declared
                        .stack
                        .synth()
                        .to_json_pretty()
                        .map_err(|err| TestCaseError::fail(err.to_string()))
                })
        };
        prop_assert_eq!(render()?, render()?);
    }

    #[test]
    fn selected_subnet_is_first_public(cidr in private_range(), zones in 1u8..=4) {
        let declared = declare_stack(&props_for(cidr, zones))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let first = declared.network.public_subnets().first().cloned();
        prop_assert_eq!(first.as_ref(), Some(&declared.public_subnet));
        prop_assert_eq!(declared.instance.subnet(), declared.public_subnet.logical_id());
    }

    #[test]
    fn outputs_never_change_resources(cidr in private_range(), zones in 1u8..=4) {
        let declared = declare_stack(&props_for(cidr, zones))
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let with_outputs = declared.stack.synth();
        let mut stripped = declared.stack;
        stripped.clear_outputs();
        prop_assert_eq!(with_outputs.resources, stripped.synth().resources);
    }
}
