use std::sync::Once;

pub type TestResult<T = ()> = color_eyre::eyre::Result<T>;

static COLOR_EYRE_INSTALL: Once = Once::new();
pub(super) fn install() {
    COLOR_EYRE_INSTALL.call_once(|| {
        let _ = color_eyre::install();
    });
}

macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {{
        let (left, right) = (&$left, &$right);
        ::color_eyre::eyre::ensure!(
            left == right,
            "assertion failed: `(left == right)`\n  left: `{left:?}`\n right: `{right:?}`"
        );
    }};
}
