//! Round-trips permission sets through their text form.
//!
//! Run with: cargo run --example text_protocol

use enum_registry::{bitflag_enum, enumeration, BitflagDefinition, EnumDefinition};

enumeration! {
    pub struct Roles => u8 {
        Guest = 1;
        Member = 2;
        Admin = 3;
    }
}

bitflag_enum! {
    #[separator = "|"]
    pub struct Permissions => Permission: u16 {
        Nothing = 0;
        Read = 1 << 0;
        Write = 1 << 1;
        Execute = 1 << 2;
    }
}

fn main() {
    enum_registry::configure(", ", true).expect("valid separator");

    let role = Roles::parse("admin", true).expect("known role");
    println!("role {} = {}", Roles::stringify(&role), role);

    let rw = Permissions.Read() | Permissions.Write();
    println!("{:?}", rw);
    println!("as text:  {}", rw);
    println!("as bytes: {:?}", rw.as_bytes());

    for input in ["read|execute", "Write | Bogus", "nothing"] {
        match Permissions::parse(input, true) {
            Ok(flags) => println!("{input:>16} -> {flags} ({flags:#x})"),
            Err(err) => {
                let lenient = Permissions::parse(input, false).unwrap_or_default();
                println!("{input:>16} -> {err}; lenient: {lenient}");
            }
        }
    }

    let granted: Permission = "Read|Write|Execute".parse().expect("known names");
    let revoked = granted - Permissions.Write();
    println!(
        "after revoking write: {} (still reads: {})",
        revoked,
        revoked.contains(Permissions.Read())
    );
    println!("members: {:?}", Permissions.Read().decompose());
}
