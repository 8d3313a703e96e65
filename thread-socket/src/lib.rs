// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod cluster;
pub mod frame_codec;
pub mod socket_transport;
pub mod thread_runtime;
