pub mod onetime_code;
