pub use std::backtrace::Backtrace;

pub use anyhow::{
    anyhow,
    bail,
    ensure,
};
pub use paste::paste;
pub use regex::{
    Regex,
    RegexBuilder,
};
pub use thiserror::Error;

pub type EmptyResult = anyhow::Result<()>;

pub const CARGO_REGISTRY_DIR: &str = "/.cargo/registry/";
pub const RUSTC_DIR: &str = "/rustc/";
pub const GLIBC: &str = "glibc";

// Builds a thiserror enum plus one snake_case constructor per variant that hands back an
// anyhow::Error, so call sites can write `bail!(InjectorError::volume_collision(name))`.
// String variants take a &str; every other payload type is taken by reference and cloned.
#[macro_export]
macro_rules! err_impl {
    (@hidden $errtype:ident, $item:ident, String) => {
        paste! {
            pub fn [<$item:snake>](in_: &str) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.into())}
            }
        }
    };

    (@hidden $errtype:ident, $item:ident, $($dtype:tt)::+) => {
        paste! {
            pub fn [<$item:snake>](in_: &$($dtype)::+) -> anyhow::Error {
                anyhow!{$errtype::$item(in_.clone())}
            }
        }
    };

    ($errtype:ident,
        $(#[$errinfo:meta] $item:ident($($dtype:tt)::+),)+
    ) => {
        #[derive(Clone, Debug, Error, PartialEq)]
        pub enum $errtype {
            $(#[$errinfo] $item($($dtype)::+)),+
        }

        impl $errtype {
            $(err_impl! {@hidden $errtype, $item, $($dtype)::+})+
        }
    };
}

// Trims a full tokio backtrace down to the frames that come from our own crates; frames from
// the standard library, libc, or registry dependencies are collapsed into a "skipped" marker.
// Building the regex and walking the trace isn't free, so this is only meant for the fatal
// error path in main.
#[macro_export]
macro_rules! skerr {
    (@hidden $err:ident, $msg:literal, $($args:expr),*) => {
        let bt = $err.backtrace().to_string();
        let mut skipped_frames = 0;
        let mut filtered_bt = String::new();
        if let Ok(re) = RegexBuilder::new(r"^\s+\d+(?s:.*?)(\s+at\s+.*:\d+)$").multi_line(true).build() {
            for frame in re.find_iter(&bt).map(|m| m.as_str()) {
                if frame.contains(CARGO_REGISTRY_DIR) || frame.contains(RUSTC_DIR) || frame.contains(GLIBC) {
                    skipped_frames += 1;
                    continue;
                }

                match skipped_frames {
                    0 => (),
                    1 => filtered_bt += "      -- <skipped 1 frame> --\n",
                    n => filtered_bt += &format!("      -- <skipped {n} frames> --\n"),
                }
                filtered_bt += &format!("{frame}\n");
                skipped_frames = 0;
            }
        }

        match skipped_frames {
            0 => (),
            1 => filtered_bt += "      -- <skipped 1 frame> --",
            n => filtered_bt += &format!("      -- <skipped {n} frames> --"),
        }
        error!(concat!($msg, "\n\n{}\n\nPartial Stack Trace:\n\n{}\n\n") $(, $args)*, $err, filtered_bt);
    };

    ($err:ident, $msg:literal) => {
        skerr! {@hidden $err, $msg, };
    };

    ($err:ident, $msg:literal, $($args:expr),*) => {
        skerr! {@hidden $err, $msg, $($args),*};
    };
}

pub use {
    err_impl,
    skerr,
};
