use std::{env, path::PathBuf};

// ffmpeg-sys-next does the actual discovery; this only tells Windows users
// what to set when it is likely to fail.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_TRIPLET", "VCPKGRS_DYNAMIC"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(vcpkg_root) = env::var_os("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framestitch needs FFmpeg development libraries; set FFMPEG_DIR (or VCPKG_ROOT with an ffmpeg install)."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if candidate.join("include").join("libavformat").is_dir() {
        println!(
            "cargo:warning=Found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=No FFmpeg headers under {}; install ffmpeg with vcpkg or set FFMPEG_DIR.",
            candidate.display()
        );
    }
}
