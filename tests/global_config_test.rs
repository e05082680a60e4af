//! Process-wide configuration. Kept in its own test binary: the first
//! configuration wins for the whole process.

use enum_registry::{bitflag_enum, configure, current, BitflagDefinition, ConfigError};

bitflag_enum! {
    pub struct Samples => Sample: u8 {
        Foo = 1;
        Bar = 2;
    }
}

#[test]
fn first_configuration_wins_for_the_process() {
    // Rejected without claiming the slot.
    assert_eq!(configure("", true), Err(ConfigError::EmptySeparator));

    configure(" + ", false).unwrap();
    configure("|", true).unwrap();

    assert_eq!(current().separator, " + ");
    assert!(!current().case_insensitive);

    let text = Samples::stringify(Samples.Foo() | Samples.Bar());
    assert_eq!(text, "Foo + Bar");
    assert_eq!(Samples::parse("Foo + Bar", true), Ok(Samples.Foo() | Samples.Bar()));
    assert!(Samples::parse("foo", true).is_err());
}
