//! Compile-time defaults, merged by build.rs from library values and the
//! optional user file named by `UTHREAD_CONFIG_RS`.

include!(concat!(env!("OUT_DIR"), "/uthread_merged_config.rs"));
