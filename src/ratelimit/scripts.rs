//! Server-side scripts for atomic rate-limit checks.
//!
//! Both scripts execute the full read-modify-write sequence as one indivisible
//! unit on the store, which is what makes the limits safe under concurrent
//! callers sharing a key across processes. Return values are shaped as
//! `{allowed, remaining, seconds}` with fractional values rendered as strings,
//! since the store's script runtime truncates numbers to integers on reply.

/// Token bucket refill-and-consume.
///
/// KEYS[1] bucket key; ARGV: now (epoch seconds, fractional), refill rate
/// (tokens/second), bucket capacity, tokens to consume.
///
/// Replies `{1, tostring(tokens_left), tostring(seconds_until_full)}` on
/// admit, `{0, tostring(tokens_left), tostring(retry_after_seconds)}` on deny.
pub const TOKEN_BUCKET_SCRIPT: &str = r"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local rate = tonumber(ARGV[2])
local capacity = tonumber(ARGV[3])
local requested = tonumber(ARGV[4])

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1]) or capacity
local last_refill = tonumber(bucket[2]) or now

local elapsed = now - last_refill
if elapsed > 0 then
    tokens = math.min(capacity, tokens + elapsed * rate)
end

if tokens >= requested then
    tokens = tokens - requested
    redis.call('HSET', key, 'tokens', tokens, 'last_refill', now)
    redis.call('EXPIRE', key, 3600)
    return {1, tostring(tokens), tostring((capacity - tokens) / rate)}
else
    return {0, tostring(tokens), tostring((requested - tokens) / rate)}
end
";

/// Sliding window prune-count-insert.
///
/// KEYS[1] window key; ARGV: window start (epoch seconds), now, max requests,
/// window length (seconds), unique request id.
///
/// Replies `{1, remaining, tostring(window_seconds)}` on admit,
/// `{0, 0, tostring(retry_after_seconds)}` on deny where retry_after derives
/// from the oldest surviving entry's age.
pub const SLIDING_WINDOW_SCRIPT: &str = r"
local key = KEYS[1]
local window_start = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local window = tonumber(ARGV[4])
local request_id = ARGV[5]

redis.call('ZREMRANGEBYSCORE', key, 0, window_start)
local count = redis.call('ZCARD', key)

if count < max_requests then
    redis.call('ZADD', key, now, request_id)
    redis.call('EXPIRE', key, math.floor(window) + 1)
    return {1, max_requests - count - 1, tostring(window)}
else
    local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = window
    if oldest[2] then
        retry_after = tonumber(oldest[2]) + window - now
    end
    return {0, 0, tostring(retry_after)}
end
";
