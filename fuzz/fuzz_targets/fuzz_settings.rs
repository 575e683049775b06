// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use blurwatch::config::KeyConfig;
use blurwatch::rewrite;
use blurwatch::settings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let keys = KeyConfig::default();
    let Ok(found) = settings::scan(text, &keys) else {
        return;
    };
    if let Some(image) = found.background_image {
        let name = rewrite::file_name_of(&image.path);
        let out = rewrite::rewrite(text, &image, &keys.image, &format!("/tmp/{name}"), false)
            .expect("image line came from this text");
        assert!(rewrite::restore(&out.text, &out.original_line, &out.replacement).is_some());
    }
});
