pub use internal::*;

#[cfg(feature = "single-threaded")]
mod internal {

    pub fn par_iter_mut1<T1: Send + Sync, F: Fn(usize, &mut T1) + Send + Sync>(arr1: &mut [T1], f: F) {
        arr1.iter_mut().enumerate().for_each(|(idx, v1)| {
            f(idx, v1);
        });
    }

    /// Visit matching row chunks of four arrays. `len1` is the chunk length of `arr1`,
    /// `len` the chunk length of the other three.
    pub fn par_chunks_mut4<
        T1: Send + Sync,
        T2: Send + Sync,
        T3: Send + Sync,
        T4: Send + Sync,
        F: Fn(usize, &mut [T1], &mut [T2], &mut [T3], &mut [T4]) + Send + Sync,
    >(
        arr1: &mut [T1],
        len1: usize,
        arr2: &mut [T2],
        arr3: &mut [T3],
        arr4: &mut [T4],
        len: usize,
        f: F,
    ) {
        arr1.chunks_mut(len1)
            .zip(arr2.chunks_mut(len))
            .zip(arr3.chunks_mut(len))
            .zip(arr4.chunks_mut(len))
            .enumerate()
            .for_each(|(row, (((c1, c2), c3), c4))| {
                f(row, c1, c2, c3, c4);
            });
    }
}

#[cfg(not(feature = "single-threaded"))]
mod internal {
    use rayon::prelude::*;

    pub fn par_iter_mut1<T1: Send + Sync, F: Fn(usize, &mut T1) + Send + Sync>(arr1: &mut [T1], f: F) {
        arr1.into_par_iter().enumerate().for_each(|(idx, v1)| {
            f(idx, v1);
        });
    }

    /// Visit matching row chunks of four arrays. `len1` is the chunk length of `arr1`,
    /// `len` the chunk length of the other three.
    pub fn par_chunks_mut4<
        T1: Send + Sync,
        T2: Send + Sync,
        T3: Send + Sync,
        T4: Send + Sync,
        F: Fn(usize, &mut [T1], &mut [T2], &mut [T3], &mut [T4]) + Send + Sync,
    >(
        arr1: &mut [T1],
        len1: usize,
        arr2: &mut [T2],
        arr3: &mut [T3],
        arr4: &mut [T4],
        len: usize,
        f: F,
    ) {
        arr1.par_chunks_mut(len1)
            .zip(arr2.par_chunks_mut(len))
            .zip(arr3.par_chunks_mut(len))
            .zip(arr4.par_chunks_mut(len))
            .enumerate()
            .for_each(|(row, (((c1, c2), c3), c4))| {
                f(row, c1, c2, c3, c4);
            });
    }
}

#[test]
fn chunks_are_visited_with_their_row() {
    let width = 3;
    let rows = 4;
    let mut a = vec![0usize; width * 2 * rows];
    let mut b = vec![0usize; width * rows];
    let mut c = vec![0usize; width * rows];
    let mut d = vec![0usize; width * rows];

    par_chunks_mut4(&mut a, width * 2, &mut b, &mut c, &mut d, width, |row, ca, cb, cc, cd| {
        assert_eq!(ca.len(), width * 2);
        assert_eq!(cb.len(), width);
        ca.iter_mut().for_each(|v| *v = row);
        cb.iter_mut().for_each(|v| *v = row + 10);
        cc.iter_mut().for_each(|v| *v = row + 20);
        cd.iter_mut().for_each(|v| *v = row + 30);
    });

    for row in 0..rows {
        assert!(a[row * width * 2..(row + 1) * width * 2].iter().all(|&v| v == row));
        assert!(b[row * width..(row + 1) * width].iter().all(|&v| v == row + 10));
        assert!(c[row * width..(row + 1) * width].iter().all(|&v| v == row + 20));
        assert!(d[row * width..(row + 1) * width].iter().all(|&v| v == row + 30));
    }
}

#[test]
fn every_element_is_visited_with_its_index() {
    let mut v = vec![0usize; 100];
    par_iter_mut1(&mut v, |i, x| *x = i * i);
    assert!(v.iter().enumerate().all(|(i, &x)| x == i * i));
}
