
use rstest::*;
use tracing_test::traced_test;
