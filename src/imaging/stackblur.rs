// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Stack blur
//!
//! Approximates a gaussian blur with two separable passes of a triangular
//! kernel. Each pass keeps a ring of `2r + 1` pixels plus running incoming and
//! outgoing sums, so the cost per pixel does not depend on the radius.

use image::RgbaImage;

/// Largest radius applied; bigger requests are clamped.
pub const MAX_RADIUS: u32 = 254;

/// Blur an RGBA image in place
pub fn stack_blur(img: &mut RgbaImage, radius: u32) {
    let radius = radius.min(MAX_RADIUS) as usize;
    let (width, height) = (img.width() as usize, img.height() as usize);
    if radius == 0 || width == 0 || height == 0 {
        return;
    }

    let mut blur = LineBlur::new(radius);
    let buf: &mut [u8] = &mut **img;

    let mut line = Vec::with_capacity(width.max(height));
    for y in 0..height {
        line.clear();
        line.extend((0..width).map(|x| pixel_at(buf, y * width + x)));
        blur.run(&mut line);
        for (x, px) in line.iter().enumerate() {
            set_pixel(buf, y * width + x, *px);
        }
    }

    for x in 0..width {
        line.clear();
        line.extend((0..height).map(|y| pixel_at(buf, y * width + x)));
        blur.run(&mut line);
        for (y, px) in line.iter().enumerate() {
            set_pixel(buf, y * width + x, *px);
        }
    }
}

fn pixel_at(buf: &[u8], index: usize) -> [u8; 4] {
    let i = index * 4;
    [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
}

fn set_pixel(buf: &mut [u8], index: usize, px: [u8; 4]) {
    let i = index * 4;
    buf[i..i + 4].copy_from_slice(&px);
}

/// One-dimensional pass, reused across rows and columns
struct LineBlur {
    radius: usize,
    divisor: u32,
    stack: Vec<[u32; 4]>,
    out: Vec<[u8; 4]>,
}

impl LineBlur {
    fn new(radius: usize) -> Self {
        let r = radius as u32 + 1;
        Self {
            radius,
            divisor: r * r,
            stack: vec![[0; 4]; 2 * radius + 1],
            out: Vec::new(),
        }
    }

    fn run(&mut self, line: &mut [[u8; 4]]) {
        let len = line.len();
        let r = self.radius;
        let size = self.stack.len();
        let divisor = self.divisor;
        let last = len - 1;
        let widen = |p: [u8; 4]| p.map(u32::from);

        let mut sum = [0u32; 4];
        let mut sum_in = [0u32; 4];
        let mut sum_out = [0u32; 4];

        // Left half of the kernel, including the centre, sees the clamped first pixel
        let first = widen(line[0]);
        for i in 0..=r {
            self.stack[i] = first;
            add_scaled(&mut sum, first, (i + 1) as u32);
            add(&mut sum_out, first);
        }
        for i in 1..=r {
            let p = widen(line[i.min(last)]);
            self.stack[i + r] = p;
            add_scaled(&mut sum, p, (r + 1 - i) as u32);
            add(&mut sum_in, p);
        }

        self.out.clear();
        let mut sp = r;
        for x in 0..len {
            self.out.push(sum.map(|s| (s / divisor) as u8));

            sub(&mut sum, sum_out);

            let slot = (sp + size - r) % size;
            sub(&mut sum_out, self.stack[slot]);

            let p = widen(line[(x + r + 1).min(last)]);
            self.stack[slot] = p;
            add(&mut sum_in, p);
            add(&mut sum, sum_in);

            sp = (sp + 1) % size;
            let centre = self.stack[sp];
            add(&mut sum_out, centre);
            sub(&mut sum_in, centre);
        }

        line.copy_from_slice(&self.out);
    }
}

fn add(acc: &mut [u32; 4], p: [u32; 4]) {
    for (a, v) in acc.iter_mut().zip(p) {
        *a += v;
    }
}

fn add_scaled(acc: &mut [u32; 4], p: [u32; 4], weight: u32) {
    for (a, v) in acc.iter_mut().zip(p) {
        *a += v * weight;
    }
}

fn sub(acc: &mut [u32; 4], p: [u32; 4]) {
    for (a, v) in acc.iter_mut().zip(p) {
        *a -= v;
    }
}
