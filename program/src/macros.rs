#[macro_export]
macro_rules! validate {
    ($assert:expr, $err:expr) => {{
        if ($assert) {
            Ok::<(), $crate::solana_program::program_error::ProgramError>(())
        } else {
            let error = $err;
            $crate::solana_program::msg!("Error {} thrown at {}:{}", error, file!(), line!());
            Err(error.into())
        }
    }};

    ($assert:expr, $err:expr, $($arg:tt)+) => {{
        if ($assert) {
            Ok::<(), $crate::solana_program::program_error::ProgramError>(())
        } else {
            let error = $err;
            $crate::solana_program::msg!("Error {} thrown at {}:{}", error, file!(), line!());
            $crate::solana_program::msg!($($arg)*);
            Err(error.into())
        }
    }};
}
