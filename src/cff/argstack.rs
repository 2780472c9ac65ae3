use crate::Error;

/// A fixed-capacity operand stack used by the charstring interpreter.
pub struct ArgumentsStack<'a> {
    pub data: &'a mut [f32],
    pub len: usize,
    pub max_len: usize,
}

impl<'a> ArgumentsStack<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn push(&mut self, n: f32) -> Result<(), Error> {
        if self.len == self.max_len {
            Err(Error::StackOverflow)
        } else {
            self.data[self.len] = n;
            self.len += 1;
            Ok(())
        }
    }

    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        self.data[index]
    }

    #[inline]
    pub fn pop(&mut self) -> f32 {
        debug_assert!(!self.is_empty());
        self.len -= 1;
        self.data[self.len]
    }

    #[inline]
    pub fn reverse(&mut self) {
        if self.is_empty() {
            return;
        }

        // Reverse only the actual data and not the whole stack.
        let (first, _) = self.data.split_at_mut(self.len);
        first.reverse();
    }

    /// Exposes the live part of the stack, e.g. for `roll`.
    #[inline]
    pub fn slice_mut(&mut self) -> &mut [f32] {
        &mut self.data[..self.len]
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl core::fmt::Debug for ArgumentsStack<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_list().entries(&self.data[..self.len]).finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow() {
        let mut stack = ArgumentsStack {
            data: &mut [0.0; 3],
            len: 0,
            max_len: 3,
        };
        stack.push(1.0).unwrap();
        stack.push(2.0).unwrap();
        stack.push(3.0).unwrap();
        assert!(matches!(stack.push(4.0), Err(Error::StackOverflow)));
    }

    #[test]
    fn reverse_only_live_data() {
        let mut stack = ArgumentsStack {
            data: &mut [0.0; 4],
            len: 0,
            max_len: 4,
        };
        stack.push(1.0).unwrap();
        stack.push(2.0).unwrap();
        stack.push(3.0).unwrap();
        stack.reverse();
        assert_eq!(stack.pop(), 1.0);
        assert_eq!(stack.pop(), 2.0);
        assert_eq!(stack.pop(), 3.0);
    }
}
