//! List commands implementation

use crate::backends;

/// List all backends compiled into this binary
pub fn list_backends() {
    let backends = backends::available_backends();

    if backends.is_empty() {
        println!("No backends available (recompile with backend features enabled)");
        return;
    }

    println!("Supported backends:");
    println!();
    for b in &backends {
        println!("  {:10} - {}", b.name, b.description);
        if !b.aliases.is_empty() {
            println!("  {:10}   aliases: {}", "", b.aliases.join(", "));
        }
    }
}
