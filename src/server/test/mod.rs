


mod state_keep_alive;


trait TestSliceExt {
    fn as_str(&self) -> &str;
}

impl TestSliceExt for [u8] {
    fn as_str(&self) -> &str {
        std::str::from_utf8(self).unwrap()
    }
}

pub(crate) fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}
